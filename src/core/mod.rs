pub mod office_manager;

pub use office_manager::OfficeManager;
