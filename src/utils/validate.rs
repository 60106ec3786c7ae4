use once_cell::sync::Lazy;
use regex::Regex;

static DEPARTMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9&()\- ]*$").expect("Invalid department regex")
});

/// 标题长度校验：5 <= x <= 100
pub fn validate_title(title: &str) -> Result<(), &'static str> {
    let len = title.chars().count();
    if len < 5 || len > 100 {
        return Err("Title must be between 5 and 100 characters");
    }
    Ok(())
}

/// 正文长度校验：10 <= x <= 1000
pub fn validate_message(message: &str) -> Result<(), &'static str> {
    let len = message.chars().count();
    if len < 10 || len > 1000 {
        return Err("Message must be between 10 and 1000 characters");
    }
    Ok(())
}

/// 学期取值校验：1..=8
pub fn validate_semester(semester: i32) -> Result<(), &'static str> {
    if !(1..=8).contains(&semester) {
        return Err("Semester must be between 1 and 8");
    }
    Ok(())
}

/// 院系名称校验
pub fn validate_department_name(department: &str) -> Result<(), &'static str> {
    if department.is_empty() || department.len() > 100 {
        return Err("Department name must be between 1 and 100 characters");
    }
    if !DEPARTMENT_RE.is_match(department) {
        return Err("Department name contains invalid characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_bounds() {
        assert!(validate_title("Hi").is_err());
        assert!(validate_title("Hello all").is_ok());
        assert!(validate_title(&"x".repeat(100)).is_ok());
        assert!(validate_title(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_message_bounds() {
        assert!(validate_message("too short").is_err());
        assert!(validate_message("long enough message").is_ok());
        assert!(validate_message(&"x".repeat(1000)).is_ok());
        assert!(validate_message(&"x".repeat(1001)).is_err());
    }

    #[test]
    fn test_semester_range() {
        assert!(validate_semester(0).is_err());
        assert!(validate_semester(1).is_ok());
        assert!(validate_semester(8).is_ok());
        assert!(validate_semester(9).is_err());
    }

    #[test]
    fn test_department_names() {
        assert!(validate_department_name("CSE").is_ok());
        assert!(validate_department_name("Mechanical Engineering").is_ok());
        assert!(validate_department_name("R&D (Applied)").is_ok());
        assert!(validate_department_name("").is_err());
        assert!(validate_department_name("42nd").is_err());
    }
}
