//! Text heuristics over extracted Erasmus destination documents.
//!
//! Everything here is a pure function over line-oriented text: the PDF
//! extraction backend (see `erasmus-pdf-mupdf`) produces the text, callers in
//! `erasmus-core` decide what to do with the slices. Matching is best-effort
//! over inconsistent document structure; ties are broken by document order
//! and candidate order.

pub mod config;
pub mod departments;
pub mod normalize;
pub mod section;

pub use config::{SectionConfig, SectionConfigBuilder};
pub use departments::{DepartmentsError, list_departments, list_departments_with_config};
pub use normalize::normalize_line;
pub use section::{
    SectionError, extract_department_section, extract_department_section_with_config,
};
