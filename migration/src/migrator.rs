use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202608010001_create_users::Migration),
            Box::new(migrations::m202608010002_create_exams::Migration),
            Box::new(migrations::m202608010003_create_questions::Migration),
            Box::new(migrations::m202608010004_create_responses::Migration),
            Box::new(migrations::m202608010005_create_grading_records::Migration),
            Box::new(migrations::m202608010006_create_results::Migration),
            Box::new(migrations::m202608010007_create_exam_publications::Migration),
        ]
    }
}
