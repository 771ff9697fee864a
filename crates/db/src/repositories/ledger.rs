//! PostgreSQL ledger repository.
//!
//! Implements [`LedgerRepository`] over the tables created by the initial
//! migration. Locking is the engine's job; every method here is a single
//! statement or a read followed by a single write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, NotSet, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr,
};
use tally_core::admin::{Admin, PrivateChatUser};
use tally_core::ledger::{LedgerError, LedgerRepository, NewTransaction, Transaction, TransactionKind};
use tally_core::rates::{CountryOverride, Group};
use tally_shared::types::{GroupId, MessageId, TransactionId, UserId};
use tracing::warn;

use crate::entities::{admins, group_country_rates, groups, private_chat_users, transactions};

/// Maps a database failure onto the ledger taxonomy.
fn db_err(err: DbErr) -> LedgerError {
    warn!(error = %err, "database operation failed");
    LedgerError::storage(err.to_string())
}

fn group_from_model(m: groups::Model) -> Group {
    Group {
        id: GroupId(m.id),
        name: m.name,
        in_rate: m.in_rate,
        in_fx: m.in_fx,
        out_rate: m.out_rate,
        out_fx: m.out_fx,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

fn override_from_model(m: group_country_rates::Model) -> CountryOverride {
    CountryOverride {
        group_id: GroupId(m.group_id),
        country: m.country,
        in_rate: m.in_rate,
        in_fx: m.in_fx,
        out_rate: m.out_rate,
        out_fx: m.out_fx,
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

fn transaction_from_model(m: transactions::Model) -> Result<Transaction, LedgerError> {
    let kind: TransactionKind = m.kind.parse().map_err(LedgerError::storage)?;
    Ok(Transaction {
        id: TransactionId(m.id),
        group_id: GroupId(m.group_id),
        kind,
        amount: m.amount,
        rate: m.rate,
        fx: m.fx,
        settlement: m.settlement,
        country: m.country,
        timestamp: m.local_time,
        correlation_id: m.correlation_id.map(MessageId),
        operator_id: UserId(m.operator_id),
        operator_name: m.operator_name,
        created_at: m.created_at.with_timezone(&Utc),
    })
}

fn transactions_from_models(
    models: Vec<transactions::Model>,
) -> Result<Vec<Transaction>, LedgerError> {
    models.into_iter().map(transaction_from_model).collect()
}

/// [`LedgerRepository`] backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgLedgerRepository {
    db: DatabaseConnection,
}

impl PgLedgerRepository {
    /// Creates a new repository over a connection pool.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LedgerRepository for PgLedgerRepository {
    // ========== Groups & Rates ==========

    async fn find_group(&self, id: GroupId) -> Result<Option<Group>, LedgerError> {
        Ok(groups::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(group_from_model))
    }

    async fn save_group(&self, group: &Group) -> Result<(), LedgerError> {
        let model = groups::ActiveModel {
            id: Set(group.id.0),
            name: Set(group.name.clone()),
            in_rate: Set(group.in_rate),
            in_fx: Set(group.in_fx),
            out_rate: Set(group.out_rate),
            out_fx: Set(group.out_fx),
            created_at: Set(group.created_at.into()),
            updated_at: Set(group.updated_at.into()),
        };
        groups::Entity::insert(model)
            .on_conflict(
                OnConflict::column(groups::Column::Id)
                    .update_columns([
                        groups::Column::InRate,
                        groups::Column::InFx,
                        groups::Column::OutRate,
                        groups::Column::OutFx,
                        groups::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn list_group_ids(&self) -> Result<Vec<GroupId>, LedgerError> {
        let ids: Vec<i64> = groups::Entity::find()
            .select_only()
            .column(groups::Column::Id)
            .order_by_asc(groups::Column::Id)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(ids.into_iter().map(GroupId).collect())
    }

    async fn find_country_override(
        &self,
        group_id: GroupId,
        country: &str,
    ) -> Result<Option<CountryOverride>, LedgerError> {
        Ok(
            group_country_rates::Entity::find_by_id((group_id.0, country.to_string()))
                .one(&self.db)
                .await
                .map_err(db_err)?
                .map(override_from_model),
        )
    }

    async fn list_country_overrides(
        &self,
        group_id: GroupId,
    ) -> Result<Vec<CountryOverride>, LedgerError> {
        Ok(group_country_rates::Entity::find()
            .filter(group_country_rates::Column::GroupId.eq(group_id.0))
            .order_by_asc(group_country_rates::Column::Country)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(override_from_model)
            .collect())
    }

    async fn save_country_override(&self, ov: &CountryOverride) -> Result<(), LedgerError> {
        let model = group_country_rates::ActiveModel {
            group_id: Set(ov.group_id.0),
            country: Set(ov.country.clone()),
            in_rate: Set(ov.in_rate),
            in_fx: Set(ov.in_fx),
            out_rate: Set(ov.out_rate),
            out_fx: Set(ov.out_fx),
            updated_at: Set(ov.updated_at.into()),
        };
        group_country_rates::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    group_country_rates::Column::GroupId,
                    group_country_rates::Column::Country,
                ])
                .update_columns([
                    group_country_rates::Column::InRate,
                    group_country_rates::Column::InFx,
                    group_country_rates::Column::OutRate,
                    group_country_rates::Column::OutFx,
                    group_country_rates::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete_country_override(
        &self,
        group_id: GroupId,
        country: &str,
    ) -> Result<bool, LedgerError> {
        let result = group_country_rates::Entity::delete_by_id((group_id.0, country.to_string()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }

    // ========== Transactions ==========

    async fn insert_transaction(&self, tx: NewTransaction) -> Result<Transaction, LedgerError> {
        let model = transactions::ActiveModel {
            id: NotSet,
            group_id: Set(tx.group_id.0),
            kind: Set(tx.kind.as_str().to_string()),
            amount: Set(tx.amount),
            rate: Set(tx.rate),
            fx: Set(tx.fx),
            settlement: Set(tx.settlement),
            country: Set(tx.country),
            local_time: Set(tx.timestamp),
            correlation_id: Set(None),
            operator_id: Set(tx.operator_id.0),
            operator_name: Set(tx.operator_name),
            created_at: Set(tx.created_at.into()),
        };
        let inserted = model.insert(&self.db).await.map_err(db_err)?;
        transaction_from_model(inserted)
    }

    async fn find_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, LedgerError> {
        transactions::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(transaction_from_model)
            .transpose()
    }

    async fn find_by_correlation(
        &self,
        group_id: GroupId,
        correlation_id: MessageId,
    ) -> Result<Option<Transaction>, LedgerError> {
        transactions::Entity::find()
            .filter(transactions::Column::GroupId.eq(group_id.0))
            .filter(transactions::Column::CorrelationId.eq(correlation_id.0))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(transaction_from_model)
            .transpose()
    }

    async fn set_correlation(
        &self,
        id: TransactionId,
        correlation_id: MessageId,
    ) -> Result<Transaction, LedgerError> {
        let existing = transactions::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::TransactionNotFound(id))?;

        let mut active: transactions::ActiveModel = existing.into();
        active.correlation_id = Set(Some(correlation_id.0));
        match active.update(&self.db).await {
            Ok(updated) => transaction_from_model(updated),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(LedgerError::CorrelationConflict(correlation_id))
            }
            Err(err) => Err(db_err(err)),
        }
    }

    async fn latest_of_kind(
        &self,
        group_id: GroupId,
        kind: TransactionKind,
    ) -> Result<Option<Transaction>, LedgerError> {
        transactions::Entity::find()
            .filter(transactions::Column::GroupId.eq(group_id.0))
            .filter(transactions::Column::Kind.eq(kind.as_str()))
            .order_by_desc(transactions::Column::Id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(transaction_from_model)
            .transpose()
    }

    async fn list_transactions(
        &self,
        group_id: GroupId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let models = transactions::Entity::find()
            .filter(transactions::Column::GroupId.eq(group_id.0))
            .filter(transactions::Column::CreatedAt.gte(from))
            .filter(transactions::Column::CreatedAt.lt(to))
            .order_by_asc(transactions::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        transactions_from_models(models)
    }

    async fn delete_transactions(&self, ids: &[TransactionId]) -> Result<u64, LedgerError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = transactions::Entity::delete_many()
            .filter(transactions::Column::Id.is_in(ids.iter().map(|id| id.0)))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }

    // ========== Admins & Private Chats ==========

    async fn list_admins(&self) -> Result<Vec<Admin>, LedgerError> {
        Ok(admins::Entity::find()
            .order_by_asc(admins::Column::CreatedAt)
            .order_by_asc(admins::Column::UserId)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|m| Admin {
                user_id: UserId(m.user_id),
                username: m.username,
                display_name: m.display_name,
                is_owner: false,
                created_at: m.created_at.with_timezone(&Utc),
            })
            .collect())
    }

    async fn save_admin(&self, admin: &Admin) -> Result<(), LedgerError> {
        let model = admins::ActiveModel {
            user_id: Set(admin.user_id.0),
            username: Set(admin.username.clone()),
            display_name: Set(admin.display_name.clone()),
            created_at: Set(admin.created_at.into()),
        };
        admins::Entity::insert(model)
            .on_conflict(
                OnConflict::column(admins::Column::UserId)
                    .update_columns([admins::Column::Username, admins::Column::DisplayName])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete_admin(&self, user_id: UserId) -> Result<bool, LedgerError> {
        let result = admins::Entity::delete_by_id(user_id.0)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn save_private_user(&self, user: &PrivateChatUser) -> Result<(), LedgerError> {
        let model = private_chat_users::ActiveModel {
            user_id: Set(user.user_id.0),
            username: Set(user.username.clone()),
            display_name: Set(user.display_name.clone()),
            last_message_at: Set(user.last_message_at.into()),
        };
        private_chat_users::Entity::insert(model)
            .on_conflict(
                OnConflict::column(private_chat_users::Column::UserId)
                    .update_columns([
                        private_chat_users::Column::Username,
                        private_chat_users::Column::DisplayName,
                        private_chat_users::Column::LastMessageAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn list_private_users(&self) -> Result<Vec<PrivateChatUser>, LedgerError> {
        Ok(private_chat_users::Entity::find()
            .order_by_asc(private_chat_users::Column::UserId)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|m| PrivateChatUser {
                user_id: UserId(m.user_id),
                username: m.username,
                display_name: m.display_name,
                last_message_at: m.last_message_at.with_timezone(&Utc),
            })
            .collect())
    }
}
