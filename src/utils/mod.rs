pub mod db_utils;
pub mod pagination;
pub mod roll_no_cache;
pub mod roll_no_filter;
pub mod validation;
