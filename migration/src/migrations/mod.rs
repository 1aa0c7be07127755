pub mod m202602100001_create_users;
pub mod m202602100002_create_modules;
pub mod m202602100003_create_user_module_roles;
pub mod m202602170001_create_attendance;
