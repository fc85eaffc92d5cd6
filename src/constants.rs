// --- DATA SOURCES ---
/// Bossa quote feed with every Catalyst bond currently listed
pub const BOSSA_LISTING_URL: &str = "https://api.30.bossa.pl/API/GPW/v2/Q/C/_cat_bonds";
/// Notoria bond widgets (profile + yield calculator)
pub const NOTORIA_BASE_URL: &str = "https://gpw.notoria.pl/widgets/bonds";
/// Public bond page linked from notifications
pub const BOND_DETAILS_URL: &str = "https://obligacje.pl/pl/obligacja";

// --- YIELD CALCULATOR FEES ---
pub const BROKER_FEE: &str = "0.0019";
pub const TAX_FEE: &str = "0.19";

// --- WORKER POOL ---
pub const DEFAULT_WORKER_COUNT: usize = 4;
/// Extra queue capacity on top of `bonds + workers`
pub const QUEUE_SLACK: usize = 5;
/// Additional attempts after the first one (6 in total)
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_BACKOFF_SECS: u64 = 2;

// --- REPORTING POLICY ---
pub const DEFAULT_MIN_YIELD_PCT: i64 = 2;
pub const DEFAULT_MAX_YIELD_PCT: i64 = 15;
pub const DEFAULT_MIN_HORIZON_DAYS: u32 = 360;

// --- SCHEDULING ---
pub const DEFAULT_FETCH_DELAY_MIN_SECS: u64 = 3 * 60;
pub const DEFAULT_FETCH_DELAY_MAX_SECS: u64 = 5 * 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PRICING_REQUESTS_PER_SECOND: u32 = 10;
