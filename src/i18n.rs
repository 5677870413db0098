/*
Simple i18n helper for the backend.

This module provides:
- A tiny embedded translations store for RU/EN (compile-time embedded JSON).
- A simple `tr` function to lookup translations by key + optional params.
- A `t` convenience wrapper using the default language (DEFAULT_LANG).

Usage:
    use crate::i18n;
    let msg = i18n::t("friends.self_request");
    let msg_with = i18n::tr(Some("en"), "validation.username_length", Some(&[("min", "3"), ("max", "50")]));

Notes:
- Placeholders in translation strings use single-brace format: `{name}`.
- Default language is `ru`. If a key is missing for the requested language,
  the fallback language will be used.
*/

use std::collections::HashMap;
use std::sync::OnceLock;

pub const DEFAULT_LANG: &str = "ru";

static TRANSLATIONS: OnceLock<HashMap<String, HashMap<String, String>>> = OnceLock::new();

const RU_JSON: &str = r#"
{
  "not_found.user": "Пользователь не найден",
  "not_found.user_by_email": "Пользователь с указанным email не найден",
  "not_found.friend": "Друг не найден",
  "not_found.schedule": "Событие не найдено",
  "not_found.schedule_not_owned": "Событие не найдено или вам не принадлежит",
  "not_found.shared_schedule": "Общее событие не найдено",
  "not_found.shared_schedule_not_owner": "Общее событие не найдено или у вас нет прав на его изменение",
  "friends.self_request": "Нельзя добавить себя в друзья",
  "friends.only_recipient_responds": "Только получатель запроса может изменить статус дружбы",
  "friends.invalid_response": "Статус ответа должен быть accepted или rejected",
  "friends.deleted": "Друг успешно удален",
  "sharing.requires_friendship": "Невозможно поделиться событием. Пользователь должен быть вашим другом.",
  "sharing.revoked": "Общий доступ к событию успешно отменен",
  "schedules.deleted": "Событие успешно удалено",
  "users.deleted": "Пользователь успешно удален",
  "users.forbidden": "Недостаточно прав для выполнения операции",
  "auth.inactive_account": "Учетная запись неактивна",
  "conflict.email_taken": "Email уже зарегистрирован",
  "conflict.username_taken": "Имя пользователя уже занято",
  "validation.email": "Некорректный email",
  "validation.username_length": "Имя пользователя должно содержать от {min} до {max} символов",
  "validation.username_charset": "Имя пользователя должно содержать только буквы, цифры, знаки подчеркивания и дефисы",
  "validation.password_length": "Пароль должен содержать не менее {min} символов",
  "validation.password_uppercase": "Пароль должен содержать хотя бы одну заглавную букву",
  "validation.password_lowercase": "Пароль должен содержать хотя бы одну строчную букву",
  "validation.password_digit": "Пароль должен содержать хотя бы одну цифру",
  "validation.title": "Название события должно содержать от 1 до 100 символов",
  "validation.description": "Описание события не может превышать 500 символов",
  "validation.location": "Место проведения не может превышать 200 символов",
  "validation.color": "Цвет должен быть в формате HEX (например, #FF0000)",
  "validation.end_before_start": "Время окончания должно быть позже времени начала",
  "validation.recurrence_rule": "Правило повторения может быть указано только для повторяющихся событий",
  "validation.recurrence_rule_length": "Правило повторения не может превышать 100 символов",
  "validation.pagination": "Параметры skip и limit не могут быть отрицательными",
  "app.name": "Расписание"
}
"#;

const EN_JSON: &str = r#"
{
  "not_found.user": "User not found",
  "not_found.user_by_email": "No user with the given email",
  "not_found.friend": "Friend not found",
  "not_found.schedule": "Schedule not found",
  "not_found.schedule_not_owned": "Schedule not found or not owned by you",
  "not_found.shared_schedule": "Shared schedule not found",
  "not_found.shared_schedule_not_owner": "Shared schedule not found or you are not allowed to change it",
  "friends.self_request": "You cannot add yourself as a friend",
  "friends.only_recipient_responds": "Only the recipient of a friend request can change its status",
  "friends.invalid_response": "Response status must be accepted or rejected",
  "friends.deleted": "Friend removed",
  "sharing.requires_friendship": "Cannot share the schedule. The user must be your friend.",
  "sharing.revoked": "Schedule sharing revoked",
  "schedules.deleted": "Schedule deleted",
  "users.deleted": "User deleted",
  "users.forbidden": "Not enough permissions to perform this operation",
  "auth.inactive_account": "Account is inactive",
  "conflict.email_taken": "Email is already registered",
  "conflict.username_taken": "Username is already taken",
  "validation.email": "Invalid email",
  "validation.username_length": "Username must be between {min} and {max} characters",
  "validation.username_charset": "Username may only contain letters, digits, underscores and hyphens",
  "validation.password_length": "Password must be at least {min} characters",
  "validation.password_uppercase": "Password must contain at least one uppercase letter",
  "validation.password_lowercase": "Password must contain at least one lowercase letter",
  "validation.password_digit": "Password must contain at least one digit",
  "validation.title": "Title must be between 1 and 100 characters",
  "validation.description": "Description cannot exceed 500 characters",
  "validation.location": "Location cannot exceed 200 characters",
  "validation.color": "Color must be a HEX value (e.g. #FF0000)",
  "validation.end_before_start": "End time must not be earlier than start time",
  "validation.recurrence_rule": "A recurrence rule is only allowed for recurring schedules",
  "validation.recurrence_rule_length": "Recurrence rule cannot exceed 100 characters",
  "validation.pagination": "skip and limit must not be negative",
  "app.name": "Schedule"
}
"#;

/// Initialize translations map (lazy).
fn build_translations() -> HashMap<String, HashMap<String, String>> {
    let mut out: HashMap<String, HashMap<String, String>> = HashMap::new();

    let ru_map: HashMap<String, String> = serde_json::from_str(RU_JSON).unwrap_or_else(|e| {
        panic!("failed to parse RU_JSON in i18n module: {}", e);
    });
    out.insert("ru".to_string(), ru_map);

    let en_map: HashMap<String, String> = serde_json::from_str(EN_JSON).unwrap_or_else(|e| {
        panic!("failed to parse EN_JSON in i18n module: {}", e);
    });
    out.insert("en".to_string(), en_map);

    out
}

fn translations() -> &'static HashMap<String, HashMap<String, String>> {
    TRANSLATIONS.get_or_init(build_translations)
}

/// Translate a key using an explicit language (or default if None).
///
/// Falls back to the default language, then to the key itself.
pub fn tr(lang: Option<&str>, key: &str, params: Option<&[(&str, &str)]>) -> String {
    let map = translations();

    let desired = lang.unwrap_or(DEFAULT_LANG);

    let val = map
        .get(desired)
        .and_then(|m| m.get(key))
        .cloned()
        .or_else(|| map.get(DEFAULT_LANG).and_then(|m| m.get(key)).cloned())
        .unwrap_or_else(|| key.to_string());

    if let Some(params) = params {
        let mut s = val;
        for (k, v) in params {
            s = s.replace(&format!("{{{}}}", k), v);
        }
        s
    } else {
        val
    }
}

/// Convenience wrapper: translate using default language (DEFAULT_LANG).
pub fn t(key: &str) -> String {
    tr(None, key, None)
}

/// Convenience wrapper with params (default language).
pub fn t_with(key: &str, params: &[(&str, &str)]) -> String {
    tr(None, key, Some(params))
}
