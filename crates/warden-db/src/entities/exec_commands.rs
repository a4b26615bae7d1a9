use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "gameserver_exec_commands")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub server_port: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub command: String,
    pub status: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
