//! Header row detection for statements whose header is not on the first line.
//!
//! Bank exports often open with a preamble (account holder, period, opening
//! balance) before the real table. Each leading row is scored by how many of
//! its cells look like labels; the best score wins and the earliest row wins
//! a tie.

const NUMERIC_PUNCTUATION: &[char] = &['.', ',', '-', '/', '(', ')', '+', ':', '$', '€', '£', '¥', '₹'];

/// True for cells such as `990`, `(1,200.50)`, `02-04-2024` or `10:15`.
pub fn looks_numeric(cell: &str) -> bool {
    let cell = cell.trim();
    cell.chars().any(|c| c.is_ascii_digit())
        && cell
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || NUMERIC_PUNCTUATION.contains(&c))
}

/// Number of non-empty, non-numeric-looking cells in a row.
pub fn score_row(row: &[String]) -> usize {
    row.iter()
        .filter(|cell| !cell.trim().is_empty() && !looks_numeric(cell))
        .count()
}

/// Index of the most header-like row among the first `scan_depth` rows.
///
/// Returns `None` when no scanned row has a single label-like cell.
pub fn detect_header_row(rows: &[Vec<String>], scan_depth: usize) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (index, row) in rows.iter().take(scan_depth).enumerate() {
        let score = score_row(row);
        if score == 0 {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((index, score)),
        }
    }
    best.map(|(index, _)| index)
}

/// Trims header names, names blank columns `Column N` and suffixes repeats so
/// every header is unique.
pub fn normalize_headers(raw: &[String]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::with_capacity(raw.len());
    for (i, name) in raw.iter().enumerate() {
        let base = match name.trim() {
            "" => format!("Column {}", i + 1),
            trimmed => trimmed.to_string(),
        };
        let mut candidate = base.clone();
        let mut n = 2;
        while headers.contains(&candidate) {
            candidate = format!("{} ({})", base, n);
            n += 1;
        }
        headers.push(candidate);
    }
    headers
}
