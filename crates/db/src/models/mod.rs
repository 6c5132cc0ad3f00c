pub mod ai_review;
pub mod answer_option;
pub mod question;
pub mod review;
pub mod section;
pub mod survey;
pub mod thread;
