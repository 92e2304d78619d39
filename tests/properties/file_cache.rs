//! Property tests for the file content cache.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use templater::{FileContentCache, LocalFs};

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 24,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: the cache never holds more than its capacity and always
    /// returns the bytes on disk.
    #[test]
    fn property_capacity_bound(
        capacity in 1usize..6,
        contents in proptest::collection::vec("[a-z]{0,16}", 1..12),
        order in proptest::collection::vec(0usize..12, 0..24),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<_> = contents
            .iter()
            .enumerate()
            .map(|(i, content)| {
                let path = dir.path().join(format!("f{}.tmpl", i));
                std::fs::write(&path, content).unwrap();
                path
            })
            .collect();

        let cache = FileContentCache::with_limits(Arc::new(LocalFs), capacity, Duration::from_secs(60));
        let sequence = (0..paths.len()).chain(order.into_iter().map(|i| i % paths.len()));
        for i in sequence {
            let bytes = cache.get(&paths[i]).unwrap();
            prop_assert_eq!(&bytes[..], contents[i].as_bytes());
            prop_assert!(cache.len() <= capacity);
        }
    }
}
