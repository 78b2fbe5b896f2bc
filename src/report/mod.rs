pub mod analysis;
pub mod csv_out;
pub mod staged;

pub use analysis::render_analysis;
pub use csv_out::{render_scores_csv, CsvColumns};
pub use staged::write_all_or_nothing;
