pub mod declarations;
pub mod regions;

pub use declarations::{extract_declarations, parse_declarations, DECLARATION_START_COLUMN};
pub use regions::scan_regions;
