/// Difference between total debit and total credit at which an entry stops
/// counting as balanced.
pub const DEFAULT_BALANCE_TOLERANCE: &str = "0.01";

/// Number of sample rows returned with an upload preview.
pub const DEFAULT_PREVIEW_ROWS: usize = 10;

/// Number of leading rows inspected when looking for the header row.
pub const DEFAULT_HEADER_SCAN_ROWS: usize = 25;

/// Hard cap on data rows accepted from a single statement file.
pub const DEFAULT_MAX_IMPORT_ROWS: usize = 50_000;

/// Prefix of human-readable journal entry numbers (`JE-00042`).
pub const DEFAULT_ENTRY_NUMBER_PREFIX: &str = "JE-";

/// Zero padding width of journal entry numbers.
pub const ENTRY_NUMBER_WIDTH: usize = 5;

/// Decimal places kept on stored amounts.
pub const AMOUNT_SCALE: u32 = 2;
