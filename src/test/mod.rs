//! 主机端测试支撑：断言宏与外部协作者的替身实现
