//! Application Use Cases

mod render_dashboard;

pub use render_dashboard::{KpiReport, RenderDashboard, RenderOutput, RenderReport};
