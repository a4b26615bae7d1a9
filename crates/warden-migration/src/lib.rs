use sea_orm_migration::prelude::*;

mod m0001_create_gameserver_settings;
mod m0002_create_gameserver_status;
mod m0003_create_exec_commands;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m0001_create_gameserver_settings::Migration),
            Box::new(m0002_create_gameserver_status::Migration),
            Box::new(m0003_create_exec_commands::Migration),
        ]
    }
}
