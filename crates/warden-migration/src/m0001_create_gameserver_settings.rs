use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GameserverSettings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GameserverSettings::ServerPort)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GameserverSettings::Jar)
                            .string()
                            .not_null()
                            .default("vanilla.jar"),
                    )
                    .col(
                        ColumnDef::new(GameserverSettings::Memory)
                            .integer()
                            .not_null()
                            .default(1024),
                    )
                    .col(
                        ColumnDef::new(GameserverSettings::LevelName)
                            .string()
                            .not_null()
                            .default("world"),
                    )
                    .col(
                        ColumnDef::new(GameserverSettings::LevelSeed)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(GameserverSettings::LevelType)
                            .string()
                            .not_null()
                            .default("DEFAULT"),
                    )
                    .col(
                        ColumnDef::new(GameserverSettings::Motd)
                            .string()
                            .not_null()
                            .default("A Minecraft Server"),
                    )
                    .col(
                        ColumnDef::new(GameserverSettings::MaxPlayers)
                            .integer()
                            .not_null()
                            .default(20),
                    )
                    .col(
                        ColumnDef::new(GameserverSettings::Gamemode)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(GameserverSettings::Difficulty)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(GameserverSettings::OnlineMode)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(GameserverSettings::Pvp)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(GameserverSettings::Whitelist)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(GameserverSettings::ViewDistance)
                            .integer()
                            .not_null()
                            .default(10),
                    )
                    .col(ColumnDef::new(GameserverSettings::SuspendedUntil).date().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GameserverSettings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum GameserverSettings {
    Table,
    ServerPort,
    Jar,
    Memory,
    LevelName,
    LevelSeed,
    LevelType,
    Motd,
    MaxPlayers,
    Gamemode,
    Difficulty,
    OnlineMode,
    Pvp,
    Whitelist,
    ViewDistance,
    SuspendedUntil,
}
