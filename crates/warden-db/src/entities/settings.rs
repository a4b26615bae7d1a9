use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "gameserver_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub server_port: i32,
    pub jar: String,
    pub memory: i32,
    pub level_name: String,
    pub level_seed: String,
    pub level_type: String,
    pub motd: String,
    pub max_players: i32,
    pub gamemode: i32,
    pub difficulty: i32,
    pub online_mode: bool,
    pub pvp: bool,
    pub whitelist: bool,
    pub view_distance: i32,
    pub suspended_until: Option<Date>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
