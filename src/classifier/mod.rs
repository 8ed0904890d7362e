mod domain;
mod keywords;
mod table;

pub use domain::DomainClassifier;
pub use keywords::{extract_path_keywords, host_of, normalize_domain, parent_domain};
pub use table::BUILTIN_DOMAINS;
