//! Migration: Create login audit table.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_accounts_table::Accounts;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LoginLogs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(LoginLogs::Id).uuid().not_null().primary_key())
                    // Nullable: failed lookups have no account
                    .col(ColumnDef::new(LoginLogs::AccountId).uuid().null())
                    .col(ColumnDef::new(LoginLogs::Message).text().not_null())
                    .col(
                        ColumnDef::new(LoginLogs::LogType)
                            .string_len(10)
                            .not_null()
                            .check(
                                Expr::col(LoginLogs::LogType)
                                    .is_in(["info", "warn", "error", "success"]),
                            ),
                    )
                    .col(ColumnDef::new(LoginLogs::IpAddress).string_len(45).null())
                    .col(ColumnDef::new(LoginLogs::UserAgent).text().null())
                    .col(
                        ColumnDef::new(LoginLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_login_logs_account_id")
                            .from(LoginLogs::Table, LoginLogs::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_login_logs_account_id")
                    .table(LoginLogs::Table)
                    .col(LoginLogs::AccountId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LoginLogs::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum LoginLogs {
    Table,
    Id,
    AccountId,
    Message,
    LogType,
    IpAddress,
    UserAgent,
    CreatedAt,
}
