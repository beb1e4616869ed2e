pub mod admin;
pub mod cart;
pub mod checkout;
pub mod menu;
pub mod runtime;
pub mod settings;
pub mod system_ui;
