//! Memory map classification properties.
//!
//! TOLUD estimation over contiguous and arbitrary maps, and the split of a
//! map between the usable and the reserved/MMIO classification passes.

use proptest::prelude::*;

use crab_payload::coreboot::memory::{FOUR_GIB, MemoryRegion, MemoryType};
use crab_payload::memmap::{
    ResourceDescriptor, ResourceKind, Tolud, classify_reserved, classify_usable, estimate_tolud,
};

const ALL_TYPES: [MemoryType; 7] = [
    MemoryType::Ram,
    MemoryType::Reserved,
    MemoryType::Acpi,
    MemoryType::Nvs,
    MemoryType::Unusable,
    MemoryType::Disabled,
    MemoryType::PersistentMemory,
];

/// Strategy for a single memory map entry anywhere in the first 8 GiB.
fn arb_region() -> impl Strategy<Value = MemoryRegion> {
    (
        0u64..0x2_0000_0000,
        0u64..0x1_0000_0000,
        prop::sample::select(ALL_TYPES.to_vec()),
    )
        .prop_map(|(start, size, region_type)| MemoryRegion::new(start, size, region_type))
}

fn arb_map() -> impl Strategy<Value = Vec<MemoryRegion>> {
    prop::collection::vec(arb_region(), 0..24)
}

/// Strategy for RAM entries tiling `[0, N)` in shuffled order, with `N`.
fn contiguous_ram() -> impl Strategy<Value = (Vec<MemoryRegion>, u64)> {
    prop::collection::vec(1u64..=0x1000_0000, 1..16)
        .prop_map(|sizes| {
            let mut start = 0;
            let mut map = Vec::new();
            for size in sizes {
                map.push(MemoryRegion::new(start, size, MemoryType::Ram));
                start += size;
            }
            (map, start)
        })
        .prop_flat_map(|(map, top)| (Just(map).prop_shuffle(), Just(top)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Gap-free RAM below 4 GiB puts TOLUD at its top, whatever the order.
    #[test]
    fn tolud_of_contiguous_ram((map, top) in contiguous_ram()) {
        prop_assert_eq!(estimate_tolud(&map), Tolud::new(top));
    }

    /// TOLUD never decreases as more entries are seen, and stays below 4 GiB.
    #[test]
    fn tolud_is_monotonic(map in arb_map()) {
        let mut previous = Tolud::new(0);
        for end in 0..=map.len() {
            let tolud = estimate_tolud(&map[..end]);
            prop_assert!(tolud >= previous);
            prop_assert!(tolud.address() <= FOUR_GIB);
            previous = tolud;
        }
    }

    /// Every entry is classified by exactly one pass.
    #[test]
    fn passes_partition_the_map(
        map in arb_map(),
        pcie_base in 0u64..0x1_0000_0000,
    ) {
        let tolud = estimate_tolud(&map);
        let mut usable = classify_usable(&map);
        let mut reserved = classify_reserved(&map, tolud, pcie_base);

        for region in &map {
            let descriptor: ResourceDescriptor = if region.region_type.is_usable_dram() {
                usable.next()
            } else {
                reserved.next()
            }
            .expect("entry missing from its pass");
            prop_assert_eq!(descriptor.base, region.start);
            prop_assert_eq!(descriptor.size, region.size);
            prop_assert_eq!(
                descriptor.kind == ResourceKind::SystemMemory,
                region.region_type.is_usable_dram()
            );
        }
        prop_assert!(usable.next().is_none());
        prop_assert!(reserved.next().is_none());
    }

    /// Classifying the same map with the same TOLUD twice gives the same result.
    #[test]
    fn classification_is_idempotent(map in arb_map()) {
        let tolud = estimate_tolud(&map);
        let first: Vec<_> = classify_usable(&map)
            .chain(classify_reserved(&map, tolud, 0))
            .collect();
        let second: Vec<_> = classify_usable(&map)
            .chain(classify_reserved(&map, tolud, 0))
            .collect();
        prop_assert_eq!(first, second);
    }
}

#[test]
fn reserved_extension_and_high_entry() {
    let map = [
        MemoryRegion::new(0x0, 0x1000, MemoryType::Ram),
        MemoryRegion::new(0x1000, 0x2000, MemoryType::Reserved),
        MemoryRegion::new(0x1_0000_0000, 0x1000, MemoryType::Reserved),
    ];

    let tolud = estimate_tolud(&map);
    assert_eq!(tolud.address(), 0x3000);

    let kinds: Vec<ResourceKind> = classify_reserved(&map, tolud, 0)
        .map(|descriptor| descriptor.kind)
        .collect();
    assert_eq!(kinds, [ResourceKind::Reserved, ResourceKind::Reserved]);
}
