use chrono::{DateTime, Local};

/// 时间来源，测试中可替换为固定时间
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;

    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }

    /// 本地时区的日历日期，例如 "Fri Oct 16 2026"
    fn today(&self) -> String {
        calendar_day(self.now())
    }
}

pub fn calendar_day(now: DateTime<Local>) -> String {
    now.format("%a %b %d %Y").to_string()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn calendar_day_has_no_time_component() {
        let morning = Local.with_ymd_and_hms(2026, 10, 2, 0, 5, 0).unwrap();
        let evening = Local.with_ymd_and_hms(2026, 10, 2, 23, 55, 0).unwrap();
        assert_eq!(calendar_day(morning), "Fri Oct 02 2026");
        assert_eq!(calendar_day(morning), calendar_day(evening));
    }
}
