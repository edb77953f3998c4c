pub mod colonne;
pub mod line;
pub mod tag;

pub use colonne::{Colonne, ColonneKind};
pub use line::{DataType, FinancialLine, GroupedLine, Total, FINANCIAL_LINES_VIEW};
pub use tag::Tag;
