pub mod buffer_sizer;
