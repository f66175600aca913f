use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202608010005_create_grading_records"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("grading_records"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Alias::new("response_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("teacher_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("marks_obtained")).double().not_null())
                    .col(ColumnDef::new(Alias::new("feedback")).text())
                    .col(ColumnDef::new(Alias::new("comment")).text())
                    .col(ColumnDef::new(Alias::new("status")).string().not_null())
                    .col(ColumnDef::new(Alias::new("superseded")).boolean().not_null().default(false))
                    .col(ColumnDef::new(Alias::new("regraded_from")).integer())
                    .col(ColumnDef::new(Alias::new("regrade_reason")).text())
                    .col(ColumnDef::new(Alias::new("created_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .col(ColumnDef::new(Alias::new("updated_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .foreign_key(
                        ForeignKey::create()
                            .from(Alias::new("grading_records"), Alias::new("response_id"))
                            .to(Alias::new("responses"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Alias::new("grading_records"), Alias::new("teacher_id"))
                            .to(Alias::new("users"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Alias::new("grading_records"), Alias::new("regraded_from"))
                            .to(Alias::new("grading_records"), Alias::new("id")),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("grading_records")).to_owned())
            .await
    }
}
