pub mod filter;
pub mod sample;
pub mod schema;
pub mod search;
pub mod table;
pub mod unpack;

pub use chat_lens_common::{ChatLensError, Config, Result};
pub use filter::{apply_filters, FilterSet, FilterSpec, FilterValue, UnknownColumns};
pub use sample::{filter_conversations, random_conversation};
pub use schema::{column_kind, require_columns, ColumnKind};
pub use search::{random_search_match, search_conversations, SearchMatch, SearchOptions};
pub use table::{load_table, table_info, TableInfo};
pub use unpack::unpack_conversations;
