pub mod attendance;
pub mod courses;
pub mod departments;
pub mod lessons;
pub mod likes;
pub mod professors;
pub mod skills;
pub mod students;
