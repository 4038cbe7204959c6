use prometheus_client::registry::Registry;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{
    env,
    path::{Path, PathBuf},
};
use wordindex_runtime::storage::fs;
use wordindex_storage::assortment::{
    Assortment, Attributes, Config, Container, Entry, UrlHash, WordHash,
};

/// Write buffer used across all assortment benchmarks.
pub const WRITE_BUFFER: usize = 1024 * 1024;

/// Concrete assortment type reused by every benchmark.
pub type AssortmentType = Assortment<fs::Storage>;

/// A fresh directory under the system temp directory.
pub fn directory() -> PathBuf {
    let mut rng = StdRng::from_entropy();
    env::temp_dir().join(format!("assortment_bench_{}", rng.gen::<u64>()))
}

/// Open (or create) the assortment with `capacity` entries per word in `directory`.
pub fn init(directory: &Path, capacity: usize) -> AssortmentType {
    let storage = fs::Storage::new(fs::Config::new(directory)).unwrap();
    Assortment::init(
        storage,
        &mut Registry::default(),
        Config {
            capacity,
            write_buffer: WRITE_BUFFER,
        },
    )
    .unwrap()
}

/// Generate `count` random containers holding `capacity` entries each.
pub fn get_random_containers(count: usize, capacity: usize) -> Vec<Container> {
    let mut rng = StdRng::seed_from_u64(0);
    let mut containers = Vec::with_capacity(count);
    for _ in 0..count {
        let mut container = Container::new(WordHash::new(rng.gen()), rng.gen());
        while container.len() < capacity {
            let mut attributes = [0u8; 18];
            rng.fill(&mut attributes[..]);
            container.add(Entry::new(
                UrlHash::new(rng.gen()),
                Attributes::new(attributes),
            ));
        }
        containers.push(container);
    }
    containers
}
