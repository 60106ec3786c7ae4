//! 用户存储操作（只读）

use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder};

use super::SeaOrmStorage;
use crate::entity::users::{Column, Entity as Users};
use crate::errors::{CollegeHubError, Result};
use crate::models::notifications::entities::{Audience, Notification};
use crate::models::users::entities::{User, UserRole, UserStatus};

impl SeaOrmStorage {
    /// 通过 ID 获取用户
    pub async fn get_user_by_id_impl(&self, id: i64) -> Result<Option<User>> {
        let result = Users::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CollegeHubError::database_operation(format!("查询用户失败: {e}")))?;

        Ok(result.map(|m| m.into_user()))
    }

    /// 按定向谓词批量解析邮件收件人
    ///
    /// 与 Notification::is_visible_to 同一套三维谓词，但以单条 SQL
    /// 批量求值：
    /// - 受众含 all 时不过滤角色，否则 role IN (受众角色)
    /// - 院系集合为空时不过滤，否则 department IN (集合)
    /// - 学期集合为空时不过滤，否则 (role != student OR semester IN 集合)，
    ///   即非学生永远不被学期维度排除
    ///
    /// 始终限定已验证邮箱的活跃账号。
    pub async fn find_notification_recipients_impl(
        &self,
        notification: &Notification,
    ) -> Result<Vec<User>> {
        let mut condition = Condition::all()
            .add(Column::Status.eq(UserStatus::Active.to_string()))
            .add(Column::IsEmailVerified.eq(true));

        if !notification.target_audience.contains(&Audience::All) {
            let roles: Vec<String> = notification
                .target_audience
                .iter()
                .filter_map(|audience| match audience {
                    Audience::Students => Some(UserRole::STUDENT.to_string()),
                    Audience::Teachers => Some(UserRole::TEACHER.to_string()),
                    Audience::Admin => Some(UserRole::ADMIN.to_string()),
                    Audience::All => None,
                })
                .collect();
            condition = condition.add(Column::Role.is_in(roles));
        }

        if !notification.target_departments.is_empty() {
            condition =
                condition.add(Column::Department.is_in(notification.target_departments.clone()));
        }

        if !notification.target_semesters.is_empty() {
            condition = condition.add(
                Condition::any()
                    .add(Column::Role.ne(UserRole::STUDENT))
                    .add(Column::Semester.is_in(notification.target_semesters.clone())),
            );
        }

        let users = Users::find()
            .filter(condition)
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| {
                CollegeHubError::database_operation(format!("解析通知收件人失败: {e}"))
            })?;

        Ok(users.into_iter().map(|m| m.into_user()).collect())
    }
}
