pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{
    dim, error, header, import_report, section, status, success, summary_row, timing, warn,
};
pub use progress::ImportProgress;
pub use table::{party_summary_table, penetration_table, winner_counts_table, TableBuilder};
pub use theme::{theme, Theme};
