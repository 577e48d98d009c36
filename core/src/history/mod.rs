//! Walk, group and classify the active branch of a conversation tree.

mod classify;
mod display;
mod grouping;
mod plugin;
mod validate;
mod walker;

pub use classify::DisplayType;
pub use classify::classify_group;
pub use display::DisplayGroup;
pub use display::DisplayItem;
pub use display::build_display_groups;
pub use display::display_items;
pub use grouping::MessageGroup;
pub use grouping::group_messages;
pub use plugin::PluginAction;
pub use plugin::split_plugin_actions;
pub use validate::HistoryError;
pub use validate::validate_history;
pub use walker::linearize;
