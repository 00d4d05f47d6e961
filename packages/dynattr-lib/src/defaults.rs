pub const SCHEMA: &str = "public";

pub const ORDER_BY_NULLS_LAST: bool = false;

pub const PAGE_SIZE_LIMIT: u64 = 1000;

pub const LOG_LEVEL: &str = "info";
