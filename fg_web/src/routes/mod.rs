//! ABOUTME: Route modules for the API endpoint groups
//! ABOUTME: Each module exposes a configure function mounted by create_app

pub mod stories;
