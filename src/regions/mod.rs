mod model;
mod store;

pub use model::Region;
pub use store::RegionStore;
