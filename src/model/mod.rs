pub mod attendance;
pub mod employee;
pub mod payslip;
pub mod role;
