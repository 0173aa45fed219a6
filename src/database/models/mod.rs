pub mod company;
pub mod job;
pub mod user;

pub use company::{Company, CompanyDetail, CompanyFilter, CompanyUpdate, NewCompany};
pub use job::{Job, JobDetail, JobFilter, JobListing, JobUpdate, NewJob};
pub use user::{Credentials, NewUser, Registration, User, UserDetail, UserUpdate};
