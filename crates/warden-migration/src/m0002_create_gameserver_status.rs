use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GameserverStatus::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GameserverStatus::ServerPort)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GameserverStatus::Online)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(GameserverStatus::OnlineOnRestart)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GameserverStatus::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum GameserverStatus {
    Table,
    ServerPort,
    Online,
    OnlineOnRestart,
}
