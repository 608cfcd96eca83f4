mod descriptor;
mod registry;
mod store;
mod types;

pub use descriptor::{DESCRIPTOR_FILE, ScriptDescriptor};
pub use registry::ScriptRegistry;
pub use store::{ScriptStore, SqliteScriptStore};
pub use types::{
    DiscoveryReport, ExecutionRecord, MAX_SCRIPT_NAME_LEN, ScriptDefinition, ScriptUpload,
    SkippedScript, is_valid_script_name,
};
