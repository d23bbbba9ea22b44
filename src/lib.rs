pub mod api;
pub mod catalog;
pub mod ids;
pub mod importer;
pub mod logging;

pub mod util {
    pub mod env;
}
