use sea_orm_migration::prelude::*;

use crate::m20250101_000001_create_users_table::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Users::Table)
                    .add_column(
                        ColumnDef::new(Profile::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .add_column(ColumnDef::new(Profile::Bio).text().null())
                    .add_column(ColumnDef::new(Profile::Avatar).string().null())
                    .add_column(ColumnDef::new(Profile::Website).string().null())
                    .add_column(ColumnDef::new(Profile::SocialLinks).json().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Users::Table)
                    .drop_column(Profile::Username)
                    .drop_column(Profile::Bio)
                    .drop_column(Profile::Avatar)
                    .drop_column(Profile::Website)
                    .drop_column(Profile::SocialLinks)
                    .to_owned(),
            )
            .await
    }
}

/// Columns this migration adds to `users`.
#[derive(DeriveIden)]
enum Profile {
    Username,
    Bio,
    Avatar,
    Website,
    SocialLinks,
}
