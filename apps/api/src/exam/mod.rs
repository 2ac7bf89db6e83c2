pub mod flow;
pub mod handlers;
pub mod models;
pub mod notice;
pub mod question_state;
pub mod registry;
pub mod session;
pub mod view;

#[cfg(test)]
pub mod fake;
