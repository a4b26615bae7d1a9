use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GameserverExecCommands::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GameserverExecCommands::ServerPort)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GameserverExecCommands::Command)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GameserverExecCommands::Status)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(GameserverExecCommands::ServerPort)
                            .col(GameserverExecCommands::Command),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GameserverExecCommands::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum GameserverExecCommands {
    Table,
    ServerPort,
    Command,
    Status,
}
