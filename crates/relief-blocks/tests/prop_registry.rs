use proptest::prelude::*;
use relief_blocks::config::{BlockDef, BlocksConfig};
use relief_blocks::registry::BlockRegistry;

fn def(name: &str, id: Option<u16>, alpha: Option<u8>) -> BlockDef {
    BlockDef {
        name: name.to_string(),
        id,
        alpha,
        tint: None,
        surface: None,
        topo_relevant: None,
        display_name: None,
    }
}

#[test]
fn explicit_ids_leave_placeholder_gaps() {
    let cfg = BlocksConfig {
        blocks: vec![def("air", Some(0), Some(0)), def("gold", Some(5), None)],
        unknown_block: None,
    };
    let reg = BlockRegistry::from_config(cfg).expect("registry");
    assert_eq!(reg.blocks.len(), 6);
    assert_eq!(reg.id_by_name("gold"), Some(5));
    // Gap ids resolve to placeholders, not panics.
    assert!(reg.get(3).is_some());
    assert!(reg.get(3).unwrap().name.is_empty());
    assert_eq!(reg.name_of(3), "block:3");
}

proptest! {
    // Alpha classification is a partition: opaque, translucent, invisible.
    #[test]
    fn alpha_classes_partition(alpha in 0u8..=255) {
        let cfg = BlocksConfig {
            blocks: vec![def("air", Some(0), Some(0)), def("x", None, Some(alpha))],
            unknown_block: None,
        };
        let reg = BlockRegistry::from_config(cfg).unwrap();
        let ty = reg.get(1).unwrap();
        let classes = [ty.is_opaque(), ty.is_translucent(), ty.alpha == 0];
        prop_assert_eq!(classes.iter().filter(|c| **c).count(), 1);
    }

    // Sequential definitions always get dense ids in order.
    #[test]
    fn sequential_ids_are_dense(count in 1usize..32) {
        let mut blocks = vec![def("air", Some(0), Some(0))];
        for i in 0..count {
            blocks.push(def(&format!("b{i}"), None, None));
        }
        let reg = BlockRegistry::from_config(BlocksConfig { blocks, unknown_block: None }).unwrap();
        for i in 0..count {
            prop_assert_eq!(reg.id_by_name(&format!("b{i}")), Some((i + 1) as u16));
        }
    }
}
