mod user;
pub use user::{UserEntity, UserEntityCreate, UserEntityUpdate, UserFilter, UserOrderField};

mod session;
pub use session::{Session, SessionCreate};

mod course;
pub use course::{
    ClassType, CourseCreate, CourseDescription, CourseEntity, CourseFilter, CourseOrderField,
    CoursePatch, FEATURED_LIMIT, FEATURED_MIN_RATING, TrainingLevel,
};

mod syllabus;
pub use syllabus::{SyllabusItem, SyllabusItemCreate, SyllabusSection, SyllabusSectionCreate};

mod category;
pub use category::{Category, CategoryCreate};

mod rating;
pub use rating::{CourseRating, CourseRatingUpsert};

mod enrollment;
pub use enrollment::{Enrollment, EnrollmentCreate, EnrollmentFilter, EnrollmentStatus};
