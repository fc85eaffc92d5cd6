pub mod bond;
pub mod listing;
pub mod enrichment;
pub mod retry;
pub mod pool;

pub use bond::{Bond, BondDetails, ImprovedBond, YieldQuote};
pub use enrichment::{EnrichmentClient, NotoriaClient};
pub use listing::{BossaListingSource, ListingBatch, ListingSource};
pub use pool::{EnrichedBatch, WorkerPool};
pub use retry::{RetryPolicy, enrich_with_retry};
