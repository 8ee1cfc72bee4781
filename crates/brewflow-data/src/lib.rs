pub mod loader;
pub mod schema;

pub use loader::{
    BUILTIN_PARTS, DataLoadError, FlowSetup, builtin_registry, load_flow_setup, load_layout,
    load_part_table, parse_layout_json,
};
pub use schema::{LayoutData, PartTypeData};
