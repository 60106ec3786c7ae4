//! 通知业务实体与可见性匹配逻辑
//!
//! 定向谓词：受众 / 院系 / 学期三个维度取与（AND），
//! 每个维度内为集合成员匹配（OR）。空的院系/学期集合为通配符。

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::models::users::entities::{UserRole, Viewer};

// 通知类型
#[derive(Debug, Clone, Serialize, PartialEq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/notification.ts")]
pub enum NotificationType {
    General,
    Academic,
    Event,
    Urgent,
    Maintenance,
}

impl NotificationType {
    pub const ALL: [NotificationType; 5] = [
        NotificationType::General,
        NotificationType::Academic,
        NotificationType::Event,
        NotificationType::Urgent,
        NotificationType::Maintenance,
    ];
}

impl<'de> Deserialize<'de> for NotificationType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotificationType::General => "general",
            NotificationType::Academic => "academic",
            NotificationType::Event => "event",
            NotificationType::Urgent => "urgent",
            NotificationType::Maintenance => "maintenance",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(NotificationType::General),
            "academic" => Ok(NotificationType::Academic),
            "event" => Ok(NotificationType::Event),
            "urgent" => Ok(NotificationType::Urgent),
            "maintenance" => Ok(NotificationType::Maintenance),
            _ => Err(format!(
                "无效的通知类型: '{s}'. 支持: general, academic, event, urgent, maintenance"
            )),
        }
    }
}

// 通知优先级，critical > high > medium > low
#[derive(Debug, Clone, Serialize, PartialEq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/notification.ts")]
pub enum NotificationPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl NotificationPriority {
    pub const ALL: [NotificationPriority; 4] = [
        NotificationPriority::Low,
        NotificationPriority::Medium,
        NotificationPriority::High,
        NotificationPriority::Critical,
    ];

    /// 排序权重，列表按此降序排列（再按创建时间降序）
    pub fn rank(&self) -> u8 {
        match self {
            NotificationPriority::Low => 0,
            NotificationPriority::Medium => 1,
            NotificationPriority::High => 2,
            NotificationPriority::Critical => 3,
        }
    }
}

impl<'de> Deserialize<'de> for NotificationPriority {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for NotificationPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotificationPriority::Low => "low",
            NotificationPriority::Medium => "medium",
            NotificationPriority::High => "high",
            NotificationPriority::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for NotificationPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(NotificationPriority::Low),
            "medium" => Ok(NotificationPriority::Medium),
            "high" => Ok(NotificationPriority::High),
            "critical" => Ok(NotificationPriority::Critical),
            _ => Err(format!(
                "无效的优先级: '{s}'. 支持: low, medium, high, critical"
            )),
        }
    }
}

// 目标受众维度的取值
#[derive(Debug, Clone, Serialize, PartialEq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/notification.ts")]
pub enum Audience {
    All,
    Students,
    Teachers,
    Admin,
}

impl<'de> Deserialize<'de> for Audience {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Audience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Audience::All => "all",
            Audience::Students => "students",
            Audience::Teachers => "teachers",
            Audience::Admin => "admin",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Audience {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Audience::All),
            "students" => Ok(Audience::Students),
            "teachers" => Ok(Audience::Teachers),
            "admin" => Ok(Audience::Admin),
            _ => Err(format!(
                "无效的目标受众: '{s}'. 支持: all, students, teachers, admin"
            )),
        }
    }
}

impl UserRole {
    /// 角色对应的受众取值
    pub fn as_audience(&self) -> Audience {
        match self {
            UserRole::Student => Audience::Students,
            UserRole::Teacher => Audience::Teachers,
            UserRole::Admin => Audience::Admin,
        }
    }
}

// 附件元数据
//
// 由外部文件存储服务生成，本服务原样存取，不做解释。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notification.ts")]
pub struct Attachment {
    pub file_name: String,
    pub file_url: String,
    pub file_type: String,
    pub file_size: i64,
}

// 通知实体
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notification.ts")]
pub struct Notification {
    pub id: i64,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub priority: NotificationPriority,
    pub target_audience: Vec<Audience>,
    pub target_departments: Vec<String>,
    pub target_semesters: Vec<i32>,
    pub created_by: i64,
    pub is_active: bool,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub attachments: Vec<Attachment>,
    pub view_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Notification {
    /// 通知是否已过期（expires_at 为空表示永不过期）
    pub fn is_expired_at(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            None => false,
        }
    }

    /// 可见性判定（Matcher）
    ///
    /// 失败即关闭：软删除或已过期的通知对任何人都不可见。
    /// 管理员越过三个定向维度，可见一切未过期的活跃通知。
    /// 其余观察者必须同时命中受众、院系、学期三个维度：
    /// - 受众：包含 all 或包含观察者角色
    /// - 院系：集合为空（通配）或包含观察者院系
    /// - 学期：集合为空（通配）或观察者有学期且命中；
    ///   无学期的观察者（教师）不能命中非空学期集合
    pub fn is_visible_to(&self, viewer: &Viewer) -> bool {
        self.is_visible_to_at(viewer, chrono::Utc::now())
    }

    /// 带显式时钟的可见性判定，便于测试过期边界
    pub fn is_visible_to_at(&self, viewer: &Viewer, now: chrono::DateTime<chrono::Utc>) -> bool {
        if !self.is_active || self.is_expired_at(now) {
            return false;
        }

        // 管理员越权查看，不走集合匹配
        if viewer.is_admin() {
            return true;
        }

        let audience_match = self.target_audience.contains(&Audience::All)
            || self.target_audience.contains(&viewer.role.as_audience());

        let department_match = self.target_departments.is_empty()
            || viewer
                .department
                .as_deref()
                .is_some_and(|dept| self.target_departments.iter().any(|d| d == dept));

        let semester_match = self.target_semesters.is_empty()
            || viewer
                .semester
                .is_some_and(|sem| self.target_semesters.contains(&sem));

        audience_match && department_match && semester_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn base_notification() -> Notification {
        Notification {
            id: 1,
            title: "Exam schedule published".to_string(),
            message: "The end-semester exam schedule is now available.".to_string(),
            notification_type: NotificationType::Academic,
            priority: NotificationPriority::High,
            target_audience: vec![Audience::All],
            target_departments: vec![],
            target_semesters: vec![],
            created_by: 99,
            is_active: true,
            expires_at: None,
            attachments: vec![],
            view_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn student(department: &str, semester: i32) -> Viewer {
        Viewer {
            id: 10,
            role: UserRole::Student,
            department: Some(department.to_string()),
            semester: Some(semester),
        }
    }

    fn teacher(department: &str) -> Viewer {
        Viewer {
            id: 20,
            role: UserRole::Teacher,
            department: Some(department.to_string()),
            semester: None,
        }
    }

    fn admin() -> Viewer {
        Viewer {
            id: 30,
            role: UserRole::Admin,
            department: None,
            semester: None,
        }
    }

    #[test]
    fn inactive_notification_is_never_visible() {
        let mut n = base_notification();
        n.is_active = false;
        assert!(!n.is_visible_to(&student("CSE", 3)));
        assert!(!n.is_visible_to(&admin()));
    }

    #[test]
    fn expired_notification_is_never_visible() {
        let mut n = base_notification();
        n.expires_at = Some(Utc::now() - Duration::hours(1));
        assert!(!n.is_visible_to(&student("CSE", 3)));
        assert!(!n.is_visible_to(&admin()));
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let now = Utc::now();
        let mut n = base_notification();
        n.expires_at = Some(now);
        // expires_at <= now 视为过期
        assert!(!n.is_visible_to_at(&student("CSE", 3), now));
        n.expires_at = Some(now + Duration::seconds(1));
        assert!(n.is_visible_to_at(&student("CSE", 3), now));
    }

    #[test]
    fn wildcard_notification_visible_to_everyone() {
        let n = base_notification();
        assert!(n.is_visible_to(&student("CSE", 3)));
        assert!(n.is_visible_to(&student("ME", 7)));
        assert!(n.is_visible_to(&teacher("ECE")));
        assert!(n.is_visible_to(&admin()));
    }

    #[test]
    fn admin_bypasses_all_targeting_dimensions() {
        let mut n = base_notification();
        n.target_audience = vec![Audience::Students];
        n.target_departments = vec!["CSE".to_string()];
        n.target_semesters = vec![3];
        assert!(n.is_visible_to(&admin()));
    }

    // 面向学生、不限院系、学期 {3,4} 的定向
    #[test]
    fn students_with_semester_targeting() {
        let mut n = base_notification();
        n.target_audience = vec![Audience::Students];
        n.target_semesters = vec![3, 4];

        assert!(n.is_visible_to(&student("CSE", 3)));
        assert!(n.is_visible_to(&student("ECE", 4)));
        assert!(!n.is_visible_to(&student("CSE", 5)));
        // 教师没有学期字段，非空学期集合必然不命中
        assert!(!n.is_visible_to(&teacher("CSE")));
    }

    #[test]
    fn teacher_excluded_by_audience_even_without_semester_field() {
        let mut n = base_notification();
        n.target_audience = vec![Audience::Students];
        n.target_semesters = vec![3];
        assert!(!n.is_visible_to(&teacher("CSE")));
    }

    #[test]
    fn empty_departments_is_wildcard_for_every_role() {
        let mut n = base_notification();
        n.target_audience = vec![Audience::Students, Audience::Teachers];
        assert!(n.is_visible_to(&student("CSE", 1)));
        assert!(n.is_visible_to(&student("Unheard-Of-Dept", 8)));
        assert!(n.is_visible_to(&teacher("ME")));
    }

    #[test]
    fn department_targeting_filters_other_departments() {
        let mut n = base_notification();
        n.target_departments = vec!["CSE".to_string(), "ECE".to_string()];
        assert!(n.is_visible_to(&student("CSE", 2)));
        assert!(n.is_visible_to(&teacher("ECE")));
        assert!(!n.is_visible_to(&student("ME", 2)));
        // 无院系的观察者不能命中非空院系集合
        let no_dept = Viewer {
            id: 40,
            role: UserRole::Teacher,
            department: None,
            semester: None,
        };
        assert!(!n.is_visible_to(&no_dept));
    }

    #[test]
    fn audience_match_is_disjunctive_within_dimension() {
        let mut n = base_notification();
        n.target_audience = vec![Audience::Teachers, Audience::Admin];
        assert!(n.is_visible_to(&teacher("CSE")));
        assert!(!n.is_visible_to(&student("CSE", 3)));
    }

    #[test]
    fn priority_rank_ordering() {
        assert!(NotificationPriority::Critical.rank() > NotificationPriority::High.rank());
        assert!(NotificationPriority::High.rank() > NotificationPriority::Medium.rank());
        assert!(NotificationPriority::Medium.rank() > NotificationPriority::Low.rank());
    }

    #[test]
    fn enum_round_trip_through_strings() {
        for t in NotificationType::ALL {
            assert_eq!(t.to_string().parse::<NotificationType>().unwrap(), t);
        }
        for p in NotificationPriority::ALL {
            assert_eq!(p.to_string().parse::<NotificationPriority>().unwrap(), p);
        }
        for a in ["all", "students", "teachers", "admin"] {
            assert_eq!(a.parse::<Audience>().unwrap().to_string(), a);
        }
    }
}
