//! Operational toggles and landing-page content.

mod cache;
pub mod landing;
mod store;
mod window;

pub use cache::{InMemorySettingsCache, PublicSettings, SettingsCache};
pub use landing::{HeroText, LandingPageSettings, NewLandingSetting, ResourceMeta, TimelineEntry};
pub use store::{SettingsStore, SubmissionSettings};
pub use window::{format_local, parse_setting_date, zone_label, SubmissionWindow, WindowStatus};
