//! SeaORM entity models
//!
//! Database entities for the Assignment Helper

mod academic_source;
mod analysis_result;
mod assignment;
mod student;

pub use student::{
    Entity as StudentEntity,
    Model as Student,
    ActiveModel as StudentActiveModel,
    Column as StudentColumn,
};

pub use assignment::{
    Entity as AssignmentEntity,
    Model as Assignment,
    ActiveModel as AssignmentActiveModel,
    Column as AssignmentColumn,
};

pub use analysis_result::{
    Entity as AnalysisResultEntity,
    Model as AnalysisResult,
    ActiveModel as AnalysisResultActiveModel,
    Column as AnalysisResultColumn,
    FlaggedSection,
    SuggestedSource,
};

pub use academic_source::{
    embedding_input,
    Entity as AcademicSourceEntity,
    Model as AcademicSource,
    ActiveModel as AcademicSourceActiveModel,
    Column as AcademicSourceColumn,
};
