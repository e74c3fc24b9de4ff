pub mod reference_parser;

pub use reference_parser::{
    RangeExpandError, all_references, expand_range, parse_functions, parse_range_references,
    parse_references,
};

pub use formualizer_common::{CellValue, ExcelError};
