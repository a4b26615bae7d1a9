use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "gameserver_status")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub server_port: i32,
    pub online: bool,
    pub online_on_restart: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
