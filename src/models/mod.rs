pub mod course;
pub mod student;

pub use course::{Course, CoursePatch, NewCourse};
pub use student::{NewStudent, Student, StudentPatch};
